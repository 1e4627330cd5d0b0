
pub mod dependency_tests;
pub mod graph_tests;
pub mod manager_tests;
