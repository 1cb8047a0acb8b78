/// The categorization state of a smartcontract.
pub mod smartcontract;
