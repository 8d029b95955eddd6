use crate::datasets::mnist::{Mnist, IMAGE_SIZE};
use anyhow::{anyhow, Result};
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// A named partition of the dataset. Any name outside this set is a
/// configuration error, rejected before any filesystem access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
   Train,
   Test,
}

impl Split {
   pub fn as_str(&self) -> &'static str {
      match self {
         Split::Train => "train",
         Split::Test => "test",
      }
   }
}

impl FromStr for Split {
   type Err = anyhow::Error;

   fn from_str(s: &str) -> Result<Split> {
      match s {
         "train" => Ok(Split::Train),
         "test" => Ok(Split::Test),
         _ => Err(anyhow!(
            "Unrecognized split \"{}\". Expected \"train\" or \"test\".",
            s
         )),
      }
   }
}

impl fmt::Display for Split {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Anything that can hand out its pixels as a row-major byte slice.
pub trait RawPixels {
   fn raw_pixels(&self) -> &[u8];
}

impl<T: RawPixels> RawPixels for &T {
   fn raw_pixels(&self) -> &[u8] {
      (**self).raw_pixels()
   }
}

/// One dataset entry: a decoded image and its class label.
pub struct Record<I> {
   pub image: I,
   pub label: u8,
}

/// Streams `records` once, appending each image's raw bytes to `image_path`
/// and one decimal label per line to `label_path`. Byte offset
/// `k * pixels_per_image` in the image file corresponds to line `k + 1` of
/// the label file. Parent directories are created as needed; existing
/// artifacts are truncated.
pub fn export<I, R>(
   records: I,
   pixels_per_image: usize,
   image_path: &Path,
   label_path: &Path,
) -> Result<()>
where
   I: IntoIterator<Item = Record<R>>,
   R: RawPixels,
{
   if let Some(parent) = image_path.parent() {
      fs::create_dir_all(parent)?;
   }
   if let Some(parent) = label_path.parent() {
      fs::create_dir_all(parent)?;
   }

   let mut f_image = BufWriter::new(File::create(image_path)?);
   let mut f_label = BufWriter::new(File::create(label_path)?);

   for (i, record) in records.into_iter().enumerate() {
      let pixels = record.image.raw_pixels();
      if pixels.len() != pixels_per_image {
         return Err(anyhow!(
            "Record {} has {} pixel bytes. Expected {}.",
            i,
            pixels.len(),
            pixels_per_image
         ));
      }

      f_image.write_all(pixels)?;
      writeln!(f_label, "{}", record.label)?;
   }

   f_image.flush()?;
   f_label.flush()?;

   Ok(())
}

/// Reads both artifacts back and checks their sizes against the split's
/// known record count. Any mismatch means a truncated write or a miscounted
/// record and is fatal.
pub fn validate(
   image_path: &Path,
   label_path: &Path,
   pixels_per_image: usize,
   expected_count: usize,
) -> Result<()> {
   let image_data = fs::read(image_path)?;
   if image_data.len() != expected_count * pixels_per_image {
      return Err(anyhow!(
         "Image file size does not match expected size. Expected {}, got {}.",
         expected_count * pixels_per_image,
         image_data.len()
      ));
   }

   let labels = fs::read_to_string(label_path)?;
   let line_count = labels.lines().count();
   if line_count != expected_count {
      return Err(anyhow!(
         "Label count does not match expected count. Expected {}, got {}.",
         expected_count,
         line_count
      ));
   }

   Ok(())
}

/// Exports one split to `<output_root>/processed/<split>/` and validates
/// the artifacts against the split's cardinality.
pub fn process(dataset: &Mnist, split_name: &str, output_root: &Path) -> Result<()> {
   let split: Split = split_name.parse()?;

   println!("Processing {} split ...", split);

   let split_dir = output_root.join("processed").join(split.as_str());
   let image_path = split_dir.join("images.bin");
   let label_path = split_dir.join("labels.txt");
   let expected_count = dataset.count(split);

   export(dataset.records(split), IMAGE_SIZE, &image_path, &label_path)?;
   validate(&image_path, &label_path, IMAGE_SIZE, expected_count)?;

   println!(
      "Processed {} split: {} examples, images at {}, labels at {}",
      split,
      expected_count,
      image_path.display(),
      label_path.display()
   );

   Ok(())
}
