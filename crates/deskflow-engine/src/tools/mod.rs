pub mod registry;
pub mod search;
pub mod templates;
pub mod ticket;
pub mod types;

pub use registry::ToolRegistry;
pub use search::SearchKnowledgeTool;
pub use templates::TicketTemplatesTool;
pub use ticket::{CreateTicketTool, HttpTicketClient, TicketReceipt, TicketSubmitter};
pub use types::{BoxedTool, Tool, ToolResult};
