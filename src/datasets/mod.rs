pub mod mnist;
mod utils;
