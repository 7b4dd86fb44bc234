use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IContinuousClearingAuctionFactory {
        error InvalidTokenAmount(uint256 amount);

        event AuctionCreated(
            address indexed auction,
            address indexed token,
            uint256 amount,
            bytes configData
        );

        function getAuctionAddress(
            address token,
            uint256 amount,
            bytes calldata configData,
            bytes32 salt,
            address sender
        ) external view returns (address);
    }
}
