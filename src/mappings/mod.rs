pub mod atoms;

pub use atoms::PredefinedAtoms;
