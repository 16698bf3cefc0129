pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Access, Ls, Mkdir, Mv, Reconcile, Rename, Rm, Share, Tree, UploadUrl};
