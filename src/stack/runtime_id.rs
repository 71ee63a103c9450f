crate::define_id_enum! {
    /// Execution runtime identifier
    RuntimeId {
        NodeJs => "nodejs" : "Node.js" | "node" | "nodejs",
    }
}
