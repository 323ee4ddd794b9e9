//! ### Sending letters
//!
//! This module contains the delivery path for built letters.
//!
//! One transport is available:
//!
//! * The [`smtp`] transport submits the letter to a relay server over an
//!   implicit-TLS SMTP session. It is a thin pass-through to the protocol
//!   primitives: connect, authenticate, declare sender and recipients,
//!   stream the body, close.

pub mod smtp;
