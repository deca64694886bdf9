pub mod dispatch;
pub mod sexp;
