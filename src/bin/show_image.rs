use anyhow::{anyhow, Result};
use mnist_preprocess::datasets::mnist::{Image, IMAGE_SIZE};
use std::env;
use std::fs;
use std::path::PathBuf;

// Save one record from the processed train split as a PNG.

fn main() -> Result<()> {
   let mut args = env::args().skip(1);
   let root = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
   let image_num = match args.next() {
      Some(n) => n.parse::<usize>()?,
      None => 0,
   };

   let split_dir = root.join("dataset").join("processed").join("train");
   let image_data = fs::read(split_dir.join("images.bin"))?;
   let labels = fs::read_to_string(split_dir.join("labels.txt"))?;

   let offset = image_num * IMAGE_SIZE;
   let pixels = image_data
      .get(offset..offset + IMAGE_SIZE)
      .ok_or_else(|| anyhow!("No record {} in {}.", image_num, split_dir.display()))?;
   let label = labels
      .lines()
      .nth(image_num)
      .ok_or_else(|| anyhow!("No label {} in {}.", image_num, split_dir.display()))?;

   let image = Image {
      rows: 28,
      cols: 28,
      data: pixels.to_vec(),
   };
   image
      .to_image()
      .save(format!("mnist_image_{}_{}.png", image_num, label))?;

   Ok(())
}
