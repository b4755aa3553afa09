pub mod arithmetic;
pub mod boolean;
pub mod comparison;
pub mod function;
pub mod member;
