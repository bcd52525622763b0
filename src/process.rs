//! Run external programs (compilers, the cluster scheduler) and capture what they print

/// Launch one command line and block until it exits
pub mod invoke;
