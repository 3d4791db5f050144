//! Client interface generator for request/response services declared in
//! `.proto` files. A method answers with exactly one completion response and
//! any number of update responses; the generator turns each service into
//! callback-based client stubs for C++, Objective-C and Node.js.

pub mod annotations;
pub mod code_writer;
pub mod emit;
pub mod error;
pub mod example_values;
pub mod expand;
pub mod generator;
pub mod model;
pub mod naming;
pub mod params;
pub mod schema;
pub mod validate;

pub use emit::{EmitOptions, GeneratedFile, Target};
pub use error::{ConformanceError, Diagnostic, GenerateError};
pub use example_values::ExampleValues;
pub use generator::{check_collisions, generate, GenerateRequest, Generation};
pub use schema::Schema;
