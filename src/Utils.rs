//! different utility modules used throughout the project
/// terminal (and optional file) logger built on simplelog
pub mod logger;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
/// and turn it into a spline task
pub mod task_parser;
///
mod task_parser_tests;
