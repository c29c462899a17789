//! Product-id partitioning for horizontal worker scale-out.
//!
//! Workers are bound to disjoint partitions of the product-id space, so two
//! workers never contend on the same product's CAS loop. The assignment is
//! a deterministic fold of the UUID bytes modulo the partition count, stable
//! across processes and restarts.

use stockflow_core::ProductId;

/// One worker's slice of the product-id space.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Partition {
    index: u32,
    of: u32,
}

impl Partition {
    /// Partition `index` of `of` total partitions.
    ///
    /// # Panics
    ///
    /// Panics when `of` is zero or `index` is out of range; partition
    /// topology is fixed at deployment time, so this is a programmer error.
    pub fn new(index: u32, of: u32) -> Self {
        assert!(of > 0, "partition count must be positive");
        assert!(index < of, "partition index out of range");
        Self { index, of }
    }

    /// The single partition covering every product (one-worker deployments).
    pub fn sole() -> Self {
        Self { index: 0, of: 1 }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn of(&self) -> u32 {
        self.of
    }

    /// Which partition a product belongs to, for `of` total partitions.
    pub fn partition_of(product_id: ProductId, of: u32) -> u32 {
        let bytes = product_id.as_uuid().as_bytes();
        let hi = u64::from_be_bytes(bytes[..8].try_into().expect("uuid is 16 bytes"));
        let lo = u64::from_be_bytes(bytes[8..].try_into().expect("uuid is 16 bytes"));
        ((hi ^ lo) % u64::from(of)) as u32
    }

    /// Whether this partition owns the product.
    pub fn owns(&self, product_id: ProductId) -> bool {
        Self::partition_of(product_id, self.of) == self.index
    }
}
