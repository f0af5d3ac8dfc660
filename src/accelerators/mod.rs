//! Acceleration structures speed up ray-scene intersection by
//! culling primitives a ray cannot hit.
//!
//! ## Bounding Volume Hierarchies (BVH)
//!
//! The **BVHAccel** partitions the scene's primitives into a binary
//! tree of bounding boxes, stored depth-first in a flat array so that
//! traversal needs only a small explicit stack.

pub mod bvh;
