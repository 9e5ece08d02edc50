pub mod attributes;
pub mod builder;
pub mod io;
pub mod modules;

pub use attributes::Attributes;
pub use builder::AnnotationBuilder;
pub use io::{AnnotationReader, Line, ParseError, Record};
pub use modules::{GeneModules, ModuleItem};
