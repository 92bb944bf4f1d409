//! Pure Rust CPU backend.
//!
//! Provides the reference broadcasting `Div` kernel, explicit registration
//! of the CPU kernels, and a [`CpuBackend`] context owning a tensor store.
//!
//! ```
//! use tkern_core::Shape;
//! use tkern_cpu::CpuBackend;
//!
//! let mut cpu = CpuBackend::new();
//! let a = cpu.write_f32(&[2.0, 4.0, 6.0, 8.0], &Shape::new(vec![4])).unwrap();
//! let b = cpu.write_f32(&[2.0], &Shape::new(vec![1])).unwrap();
//! let c = cpu.div(&a, &b).unwrap();
//! assert_eq!(cpu.to_vec_f32(&c).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
//! ```

pub mod backend;
pub mod div;

pub use backend::{CPU_BACKEND, CpuBackend, SharedBackend, cpu_registry, register_cpu_kernels};
pub use div::{DIV, binary_inputs, div_kernel};
