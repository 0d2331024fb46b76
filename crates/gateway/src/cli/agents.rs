use sb_agents::ResponderRegistry;

/// Print every registered responder, marking the default one.
pub fn list(registry: &ResponderRegistry) {
    for info in registry.list() {
        let marker = if registry.is_default(&info.name) {
            " (default)"
        } else {
            ""
        };
        println!(
            "{}{marker}\n    category: {}\n    {}",
            info.name, info.category, info.description
        );
    }
    println!("\n{} responder(s)", registry.len());
}
