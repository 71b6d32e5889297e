pub mod hilbert;
pub mod shapes;
