//! Token contract interface.
//!
//! Method names and signatures must match the deployed contract exactly.

use alloy::sol;

sol! {
    /// Mintable, burnable ERC20-style token.
    #[derive(Debug, PartialEq, Eq)]
    interface IToken {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);

        /// Balance of `msg.sender`.
        function getUserBalance() external view returns (uint256);

        function mint(uint256 amount) external;
        function burnToken(uint256 amount) external;
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
