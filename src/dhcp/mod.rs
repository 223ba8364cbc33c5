//! DHCP service configuration: grammar, structured edits, lease inspection.
//!
//! [`grammar`] owns the span-preserving document model, [`edit`] applies
//! structured subnet/host mutations over it, and [`leases`] reads the
//! service's lease database with the same grammar.

pub mod edit;
pub mod grammar;
pub mod leases;

pub use edit::{
    add_host, add_subnet, hosts, remove_host, remove_subnet, subnets, update_subnet, HostSpec,
    HostView, SubnetPatch, SubnetSpec, SubnetView,
};
pub use grammar::{Block, ConfigDocument, Directive, Item};
pub use leases::{parse_leases, Lease};
