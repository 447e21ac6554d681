pub mod extract;
pub mod info;
pub mod merge;
pub mod scan;
pub mod util;

pub use extract::*;
pub use info::*;
pub use merge::*;
pub use scan::*;
pub use util::*;
