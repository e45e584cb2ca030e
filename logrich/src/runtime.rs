// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The runtime layer: layered configuration, the process-wide composition
//! root, and the public API surface built on top of both.

pub mod api;
pub mod composition_root;
pub mod config;
