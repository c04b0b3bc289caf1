//! # recflow
//!
//! A concurrent streaming processor for keyed text records.
//!
//! Records are ordered key-value maps read from DKVP, NIDX, CSV, TSV,
//! JSON, PPRINT or XTAB input. A chain of verbs (`cat`, `head`, `sort`, `put`, ...) transforms
//! them, each verb on its own thread, connected by bounded channels of
//! record batches. The sink writes the result in any supported output
//! format.
//!
//! ## Overview
//!
//! - **Values** keep their original text and infer their type lazily
//! - **Verbs** consume one envelope at a time and may emit any number
//! - **End of stream** is a single envelope that every verb forwards once,
//!   after flushing whatever it buffered
//! - **Cancellation** lets `head` stop reading input it does not need
//!
//! ## Example
//!
//! ```
//! use recflow::executor::run_serial;
//! use recflow::context::{Context, Envelope};
//! use recflow::input::DkvpReader;
//! use recflow::verbs::build_chain;
//!
//! let reader = DkvpReader::new(",", "=");
//! let mut ctx = Context::new();
//! let mut input = Vec::new();
//! for line in ["a=1,b=2", "a=3,b=4", "a=5,b=6"] {
//!     input.push(Envelope::Record(reader.parse_line(line), ctx.advance()));
//! }
//! input.push(Envelope::EndOfStream(ctx));
//!
//! let chain = vec![vec!["tac".to_string()], vec!["head".to_string(), "-n".to_string(), "2".to_string()]];
//! let mut verbs = build_chain(&chain).unwrap();
//! let output = run_serial(input, &mut verbs);
//!
//! let records: Vec<String> = output
//!     .iter()
//!     .filter_map(|e| match e {
//!         Envelope::Record(r, _) => Some(r.to_string()),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(records, ["a=5,b=6", "a=3,b=4"]);
//! ```

pub mod arithmetic;
pub mod chain;
pub mod cli;
pub mod context;
pub mod error;
pub mod executor;
pub mod infer;
pub mod inplace;
pub mod input;
pub mod output;
pub mod record;
pub mod script;
pub mod stream;
pub mod value;
pub mod verb;
pub mod verbs;

pub use context::{Context, Envelope};
pub use error::{PipelineError, Result};
pub use record::Record;
pub use stream::{StreamOptions, run_stream};
pub use value::Value;
pub use verb::{Verb, VerbSetup};
