pub mod cds;
pub mod system;
