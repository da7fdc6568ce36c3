pub use builder::GraphBuilder;
pub use front_bridge::{
    BridgeError,
    FrontBridge,
};
pub use graph::IrGraph;
pub use node::{
    BinaryOp,
    Node,
    NodeId,
    NodeKind,
    ProjKind,
};
pub use verifier::{
    VerifyError,
    Verifier,
};

pub mod builder;
pub mod graph;
pub mod node;
pub mod verifier;

mod front_bridge;
