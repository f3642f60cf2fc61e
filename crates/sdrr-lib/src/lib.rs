pub mod decoder;
pub mod io;
pub mod record;
pub mod segmenter;
pub mod window;

pub use decoder::*;
pub use record::*;
pub use segmenter::*;
pub use window::*;
