// SPDX-License-Identifier: Apache-2.0

mod crypto;
mod delegate;
mod parameters;

pub use crypto::*;
pub use delegate::*;
pub use parameters::*;
