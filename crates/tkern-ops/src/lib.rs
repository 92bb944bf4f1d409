//! Broadcasting rules and dtype promotion.

pub mod broadcast;
pub mod dtype_promotion;

pub use broadcast::{broadcast_dims, broadcast_shapes, offset_of, strides, unravel_index};
pub use dtype_promotion::promote;
