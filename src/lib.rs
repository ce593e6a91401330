#![deny(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_qualifications)]

//! Reduce-scatter-block collective algorithms for distributed-memory
//! parallel computing.
//!
//! Given `p` peer processes each holding a `p * m`-element vector, the
//! *reduce-scatter-block* collective reduces the vectors element-wise
//! with a caller-supplied operator and leaves rank `i` holding the
//! `i`-th `m`-element block of the result. This crate implements three
//! interchangeable algorithms for that collective:
//!
//! - [`collective::basic`] — reduce into a root, then scatter.
//! - [`collective::recursive_doubling`] — order-preserving, works for
//!   any operator and any group size.
//! - [`collective::recursive_halving`] — commutative operators only,
//!   lower bandwidth.
//!
//! The wider parallel runtime — process launch, fabric transport,
//! topology discovery, the opaque datatype engine, the operator
//! registry — is out of scope. This crate models only the narrow
//! contracts the algorithms consume, in [`fabric`], [`datatype`], and
//! [`operator`], so they can be driven by any transport that implements
//! those traits.
//!
//! # Usage
//!
//! ```no_run
//! use coll_reduce_scatter_block::collective::{self, Algorithm, ReduceScatterInput};
//! use coll_reduce_scatter_block::datatype::Dense;
//! use coll_reduce_scatter_block::operator::Sum;
//! # use coll_reduce_scatter_block::fabric::{Communicator, CollectiveOps, PointToPoint, Rank, Request};
//! # use coll_reduce_scatter_block::error::Result;
//! # fn run(comm: &impl (Communicator + CollectiveOps<i32>), fabric: &impl PointToPoint<i32>) -> Result<()> {
//! let input = vec![0i32; 0];
//! let mut rbuf = vec![0i32; 1];
//! collective::reduce_scatter_block(
//!     comm,
//!     fabric,
//!     ReduceScatterInput::Separate(&input),
//!     &mut rbuf,
//!     1,
//!     &Dense,
//!     &Sum,
//!     Algorithm::RecursiveDoubling,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod collective;
pub mod datatype;
pub mod error;
pub mod fabric;
pub mod operator;
pub mod pattern;
pub mod rank;

pub use error::{Error, Result};
