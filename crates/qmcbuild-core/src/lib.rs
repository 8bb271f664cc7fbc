//! Build orchestration for PMR-QMC simulation executables.
//!
//! Turns a declarative parameter document plus Hamiltonian/observable
//! description files into a compiled simulation binary by generating a
//! constants header and driving the external prepare/compile toolchain.

pub mod build;
pub mod domain;
pub mod emit;
pub mod params;
pub mod pipeline;
pub mod stage;
pub mod toolkit;
