//! Simulator-style `+flag` arguments.
//!
//! Test suites invoke the harness the same way they invoke a compiled
//! hardware simulation:
//!
//! ```text
//! tbsim [+trace] +B<binary> [+D<descriptor>] [+T<timeout>] [+W<write host>]
//! ```
//!
//! Lookup follows simulator plusarg matching: the first argument starting with
//! `+<prefix>` wins and everything after the prefix is the value.

use std::path::PathBuf;

use crate::common::HarnessError;
use crate::config::RunConfig;

/// Values extracted from the plusargs of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plusargs {
    /// `+B<path>`: program image (required to run).
    pub program: Option<PathBuf>,
    /// `+D<path>`: device-descriptor blob.
    pub descriptor: Option<PathBuf>,
    /// `+T<decimal>`: step budget in half-cycles, 0 = unbounded.
    pub max_time: Option<u64>,
    /// `+W<hex>`: absolute write-host address.
    pub write_host: Option<u64>,
    /// `+trace`: record a waveform.
    pub trace: bool,
}

impl Plusargs {
    /// Extracts plusargs from `args`; other arguments are ignored.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Plusarg`] if `+T` is not decimal or `+W` is not hex.
    pub fn parse<I, S>(args: I) -> Result<Self, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();

        let max_time = plus_match(&args, "T")
            .map(|v| {
                v.parse::<u64>().map_err(|_| HarnessError::Plusarg {
                    flag: "T",
                    value: v.to_owned(),
                })
            })
            .transpose()?;

        let write_host = plus_match(&args, "W")
            .map(|v| {
                let digits = v
                    .strip_prefix("0x")
                    .or_else(|| v.strip_prefix("0X"))
                    .unwrap_or(v);
                u64::from_str_radix(digits, 16).map_err(|_| HarnessError::Plusarg {
                    flag: "W",
                    value: v.to_owned(),
                })
            })
            .transpose()?;

        Ok(Self {
            program: plus_match(&args, "B").map(PathBuf::from),
            descriptor: plus_match(&args, "D").map(PathBuf::from),
            max_time,
            write_host,
            trace: plus_match(&args, "trace") == Some(""),
        })
    }

    /// Overrides the run settings that were given on the command line.
    pub fn apply(&self, run: &mut RunConfig) {
        if let Some(max_time) = self.max_time {
            run.max_time = max_time;
        }
        if let Some(addr) = self.write_host {
            run.write_host = Some(addr);
        }
        if self.trace {
            run.trace = true;
        }
    }
}

/// Value of the first argument starting with `+prefix`.
fn plus_match<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter()
        .find_map(|arg| arg.strip_prefix('+')?.strip_prefix(prefix))
}
