use anyhow::Result;
use stepflow_engine::config::schema::PropertyInfo;
use stepflow_engine::StepRegistry;

/// Execute the `steps` command: list built-in step types and their schemas.
pub fn execute() -> Result<()> {
    let registry = StepRegistry::new();
    println!("Registered step types:");
    for descriptor in registry.descriptors() {
        let name = descriptor.registered_name();
        if name == descriptor.implementation() {
            println!("  {}  [{}]", name, descriptor.capability());
        } else {
            println!(
                "  {} ({})  [{}]",
                name,
                descriptor.implementation(),
                descriptor.capability()
            );
        }
        for property in descriptor.properties() {
            println!("    {}", describe(property));
        }
    }
    Ok(())
}

fn describe(property: &PropertyInfo) -> String {
    let mut flags = Vec::new();
    if property.required {
        flags.push("required");
    }
    if property.inline {
        flags.push("attribute");
    }
    if property.collection {
        flags.push("repeated");
    }
    if flags.is_empty() {
        format!("{}: {}", property.name, property.kind)
    } else {
        format!("{}: {} ({})", property.name, property.kind, flags.join(", "))
    }
}
