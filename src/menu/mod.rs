pub mod carousel;
pub mod library;

pub use carousel::Carousel;
pub use library::{RomEntry, scan_rom_directory};
