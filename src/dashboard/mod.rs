//! Dashboard state and navigation.

pub mod navigator;

pub use navigator::{
    Breadcrumb, DashboardNavigator, DashboardResult, DrillAction, NavigatorConfig, ResultSnapshot,
};
