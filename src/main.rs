use anyhow::Result;
use mnist_preprocess::datasets::mnist::Mnist;
use mnist_preprocess::export::process;
use std::env;
use std::path::PathBuf;

// Convert the raw MNIST dataset under <root>/dataset/raw/mnist into flat
// per-split artifacts under <root>/dataset/processed/, downloading the raw
// files first if they are missing.

fn main() -> Result<()> {
   let root = env::args()
      .nth(1)
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from("."));

   let raw_root = root.join("dataset").join("raw").join("mnist");
   let mnist = Mnist::new(&raw_root, true)?;

   let output_root = root.join("dataset");
   process(&mnist, "train", &output_root)?;
   process(&mnist, "test", &output_root)?;

   Ok(())
}
