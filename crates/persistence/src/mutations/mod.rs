// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Writes.
//!
//! Every write that guards an invariant runs inside an immediate
//! transaction, so its precondition check and its update see the same
//! database state.

pub mod assets;
pub mod identity;
pub mod sessions;
pub mod transfers;

pub use transfers::persist_transition;
