// Copyright (c) 2025 Furnora
// SPDX-License-Identifier: BUSL-1.1
//! Image validation, preprocessing and tensor encoding
//!
//! The three ordered stages that turn a raw upload into classifier input:
//! - signature/size/dimension validation (cheap, runs before any decode work)
//! - decode, square-pad resize, contrast normalization, canonical re-encode
//! - conversion to a `[1, H, W, 3]` float tensor with scoped release

pub mod preprocessing;
pub mod tensor;
pub mod validator;

pub use preprocessing::{preprocess, NormalizedImage, PreprocessError};
pub use tensor::{encode, InputTensor, TensorError};
pub use validator::{ImageValidator, ValidatedImage, ValidationError};
