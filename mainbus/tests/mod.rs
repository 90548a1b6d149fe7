//! Integration Test Organization
//!
//! This module organizes integration tests into focused areas:
//!
//! - `bus/`: Resource bus construction, delivery, back-pressure and shutdown
//! - `scenarios/`: End-to-end pipelines with producers and consumer tasks
