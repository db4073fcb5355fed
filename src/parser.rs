// This file contains the parser module, responsible for reading a Swagger/OpenAPI
// document into an index of endpoints and schema nodes.

pub mod schema;
pub mod spec;

pub use schema::{Definitions, SchemaKind, SchemaNode, StringSchema};
pub use spec::{
    ApiResponse,
    Endpoint,
    HttpMethod,
    Parameter,
    ParameterLocation,
    RequestBody,
    SpecError,
    SpecIndex,
    SpecVersion,
};
