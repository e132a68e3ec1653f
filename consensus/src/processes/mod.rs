pub mod solidity;
