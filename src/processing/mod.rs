pub mod noise;
pub mod orientation;
