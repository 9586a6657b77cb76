//! Two tenants get isolated copies of the same base feature flags; mutating
//! one tenant's copy never leaks into the other's or the base.

use ferrous_modular::tenant::{TenantId, TenantOverlay};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Features {
    flags: HashMap<String, bool>,
}

fn main() {
    let overlay = TenantOverlay::new();
    let base = Features {
        flags: HashMap::from([("f1".to_string(), true)]),
    };

    overlay.set_tenant_config_isolated(TenantId::new("tenant-1"), "features", base.clone());
    overlay.set_tenant_config_isolated(TenantId::new("tenant-2"), "features", base.clone());

    let t1 = overlay
        .get_tenant_value::<Features>(&TenantId::new("tenant-1"), "features")
        .unwrap();
    let mut mutated = (*t1).clone();
    mutated.flags.insert("f1".to_string(), false);
    mutated.flags.insert("new".to_string(), true);
    overlay.set_tenant_config_isolated(TenantId::new("tenant-1"), "features", mutated);

    let t2 = overlay
        .get_tenant_value::<Features>(&TenantId::new("tenant-2"), "features")
        .unwrap();
    println!("tenant-2 still sees: {:?}", t2.flags);
    assert_eq!(t2.flags.get("f1"), Some(&true));
    assert!(!t2.flags.contains_key("new"));
}
