//! Packet headers

use crate::parse::{DeParse, Parse, ParseWith, Step, StepWith};
