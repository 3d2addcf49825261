// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! Each function maps Diesel rows back into domain values; a missing row
//! is `Ok(None)`, never an error.

pub mod assets;
pub mod identity;
pub mod sessions;
pub mod transfers;
