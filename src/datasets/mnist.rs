use super::utils::{check_exists, download_with_pb, extract_gz};
use crate::export::{RawPixels, Record, Split};
use anyhow::{anyhow, Result};
use image::{GrayImage, Luma};
use std::fs;
use std::io;
use std::path::Path;
use tokio::runtime::Runtime;

/// Pixel bytes per decoded image: MNIST images are 28x28 grayscale.
pub const IMAGE_SIZE: usize = 28 * 28;

const MIRRORS: [&str; 2] = [
   "http://yann.lecun.com/exdb/mnist/",
   "https://ossci-datasets.s3.amazonaws.com/mnist/",
];

const GZ_FILENAMES: [&str; 4] = [
   "train-images-idx3-ubyte.gz",
   "train-labels-idx1-ubyte.gz",
   "t10k-images-idx3-ubyte.gz",
   "t10k-labels-idx1-ubyte.gz",
];
const RAW_FILENAMES: [&str; 4] = [
   "train-images.idx3-ubyte",
   "train-labels.idx1-ubyte",
   "t10k-images.idx3-ubyte",
   "t10k-labels.idx1-ubyte",
];

const LABEL_MAGIC_NUMBER: u32 = 2049;
const IMAGE_MAGIC_NUMBER: u32 = 2051;

pub struct Image {
   pub rows: u32,
   pub cols: u32,
   pub data: Vec<u8>,
}

impl Image {
   pub fn to_image(&self) -> GrayImage {
      let mut img = GrayImage::new(self.cols, self.rows);
      for (i, pixel) in self.data.iter().enumerate() {
         img.put_pixel(
            (i % self.cols as usize) as u32,
            (i / self.cols as usize) as u32,
            Luma([*pixel]),
         );
      }
      img
   }
}

impl RawPixels for Image {
   fn raw_pixels(&self) -> &[u8] {
      &self.data
   }
}

pub struct Mnist {
   pub train_images: Vec<Image>,
   pub train_labels: Vec<u8>,
   pub test_images: Vec<Image>,
   pub test_labels: Vec<u8>,
}

impl Mnist {
   pub fn new<P: AsRef<Path>>(root: &P, download: bool) -> Result<Mnist> {
      let root = root.as_ref();
      if download {
         Mnist::download(root)?;
      }

      Mnist::load_data(root).map_err(|e| match e.downcast_ref::<io::Error>() {
         Some(_) => anyhow!(
            "MNIST dataset files were not found in \"{}\".",
            root.to_str().unwrap_or("")
         ),
         None => e,
      })
   }

   /// Number of records in a split, the ground truth for post-write
   /// validation.
   pub fn count(&self, split: Split) -> usize {
      match split {
         Split::Train => self.train_labels.len(),
         Split::Test => self.test_labels.len(),
      }
   }

   /// Single-pass, in-order iteration over a split's records.
   pub fn records(&self, split: Split) -> impl Iterator<Item = Record<&Image>> {
      let (images, labels) = match split {
         Split::Train => (&self.train_images, &self.train_labels),
         Split::Test => (&self.test_images, &self.test_labels),
      };
      images
         .iter()
         .zip(labels.iter())
         .map(|(image, &label)| Record { image, label })
   }

   fn load_data(root: &Path) -> Result<Mnist> {
      let train_images_file = fs::read(root.join(RAW_FILENAMES[0]))?;
      let train_labels_file = fs::read(root.join(RAW_FILENAMES[1]))?;
      let test_images_file = fs::read(root.join(RAW_FILENAMES[2]))?;
      let test_labels_file = fs::read(root.join(RAW_FILENAMES[3]))?;

      Ok(Mnist {
         train_images: Mnist::parse_images(&train_images_file)?,
         train_labels: Mnist::parse_labels(&train_labels_file)?,
         test_images: Mnist::parse_images(&test_images_file)?,
         test_labels: Mnist::parse_labels(&test_labels_file)?,
      })
   }

   fn parse_labels<D: AsRef<[u8]>>(data: &D) -> Result<Vec<u8>> {
      let data = data.as_ref();
      if data.len() < 8 {
         return Err(anyhow!("Invalid label data. Header is truncated."));
      }

      let magic_number = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
      if magic_number != LABEL_MAGIC_NUMBER {
         return Err(anyhow!("Invalid label data. Magic number is not correct."));
      }

      let num_items = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
      if data[8..].len() != num_items as usize {
         return Err(anyhow!(
            "Invalid label data. Number of items is not correct."
         ));
      }
      Ok(data[8..].to_vec())
   }

   fn parse_images<D: AsRef<[u8]>>(data: &D) -> Result<Vec<Image>> {
      let data = data.as_ref();
      if data.len() < 16 {
         return Err(anyhow!("Invalid image data. Header is truncated."));
      }

      let magic_number = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
      if magic_number != IMAGE_MAGIC_NUMBER {
         return Err(anyhow!("Invalid image data. Magic number is not correct."));
      }

      let num_items = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
      let num_rows = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
      let num_cols = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);
      let pixels_per_image = num_rows as usize * num_cols as usize;

      if data[16..].len() != num_items as usize * pixels_per_image {
         return Err(anyhow!(
            "Invalid image data. Number of items is not correct."
         ));
      }

      let images: Vec<Image> = data[16..]
         .chunks_exact(pixels_per_image)
         .map(|chunk| Image {
            rows: num_rows,
            cols: num_cols,
            data: chunk.to_vec(),
         })
         .collect();
      Ok(images)
   }

   fn download(root: &Path) -> Result<()> {
      let client = reqwest::Client::new();
      let rt = Runtime::new()?;

      for (gz_filename, raw_filename) in GZ_FILENAMES.iter().zip(RAW_FILENAMES.iter()) {
         let raw_path = root.join(raw_filename);
         if check_exists(&raw_path) {
            continue;
         }

         let mut downloaded = false;
         for mirror in MIRRORS.iter() {
            let url = format!("{}{}", mirror, gz_filename);
            match rt.block_on(download_with_pb(&client, &url, root, gz_filename)) {
               Ok(_) => {
                  downloaded = true;
                  break;
               }
               Err(e) => {
                  println!("Failed to download (trying another mirror):\n{}\n", e);
                  continue;
               }
            }
         }
         if !downloaded {
            return Err(anyhow!(
               "Failed to download {} from all mirrors.",
               gz_filename
            ));
         }
         extract_gz(&root.join(gz_filename), &raw_path)?;
      }
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn label_file(labels: &[u8]) -> Vec<u8> {
      let mut data = LABEL_MAGIC_NUMBER.to_be_bytes().to_vec();
      data.extend((labels.len() as u32).to_be_bytes());
      data.extend(labels);
      data
   }

   fn image_file(rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
      let count = pixels.len() as u32 / (rows * cols);
      let mut data = IMAGE_MAGIC_NUMBER.to_be_bytes().to_vec();
      data.extend(count.to_be_bytes());
      data.extend(rows.to_be_bytes());
      data.extend(cols.to_be_bytes());
      data.extend(pixels);
      data
   }

   #[test]
   fn parses_labels() {
      let labels = Mnist::parse_labels(&label_file(&[5, 0, 9])).unwrap();
      assert_eq!(labels, vec![5, 0, 9]);
   }

   #[test]
   fn rejects_label_data_with_wrong_magic_number() {
      let mut data = label_file(&[5, 0, 9]);
      data[3] = 0;
      assert!(Mnist::parse_labels(&data).is_err());
   }

   #[test]
   fn rejects_label_data_with_wrong_item_count() {
      let mut data = label_file(&[5, 0, 9]);
      data.push(1);
      assert!(Mnist::parse_labels(&data).is_err());
   }

   #[test]
   fn parses_images() {
      let pixels: Vec<u8> = (0..8).collect();
      let images = Mnist::parse_images(&image_file(2, 2, &pixels)).unwrap();

      assert_eq!(images.len(), 2);
      assert_eq!(images[0].rows, 2);
      assert_eq!(images[0].cols, 2);
      assert_eq!(images[0].data, vec![0, 1, 2, 3]);
      assert_eq!(images[1].data, vec![4, 5, 6, 7]);
   }

   #[test]
   fn rejects_image_data_with_wrong_magic_number() {
      let data = label_file(&[5, 0, 9]);
      assert!(Mnist::parse_images(&data).is_err());
   }

   #[test]
   fn rejects_truncated_image_data() {
      let pixels: Vec<u8> = (0..8).collect();
      let mut data = image_file(2, 2, &pixels);
      data.pop();
      assert!(Mnist::parse_images(&data).is_err());
   }

   #[test]
   fn iterates_records_in_order() {
      let dataset = Mnist {
         train_images: vec![
            Image {
               rows: 1,
               cols: 2,
               data: vec![0, 1],
            },
            Image {
               rows: 1,
               cols: 2,
               data: vec![2, 3],
            },
         ],
         train_labels: vec![7, 3],
         test_images: Vec::new(),
         test_labels: Vec::new(),
      };

      assert_eq!(dataset.count(Split::Train), 2);
      assert_eq!(dataset.count(Split::Test), 0);

      let records: Vec<_> = dataset.records(Split::Train).collect();
      assert_eq!(records.len(), 2);
      assert_eq!(records[0].image.data, vec![0, 1]);
      assert_eq!(records[0].label, 7);
      assert_eq!(records[1].image.data, vec![2, 3]);
      assert_eq!(records[1].label, 3);
   }
}
