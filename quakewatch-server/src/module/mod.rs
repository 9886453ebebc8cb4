pub mod faults;
pub mod quake;
pub mod usgs;
