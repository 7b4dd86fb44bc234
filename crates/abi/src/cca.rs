use alloy::sol;

sol! {
    /// AuctionParameters from IContinuousClearingAuction.sol, ABI-encoded as
    /// the factory's `configData`.
    struct AuctionParameters {
        address currency;
        address tokensRecipient;
        address fundsRecipient;
        uint64 startBlock;
        uint64 endBlock;
        uint64 claimBlock;
        uint256 tickSpacing;
        address validationHook;
        uint256 floorPrice;
        uint128 requiredCurrencyRaised;
        bytes auctionStepsData;
    }

    /// Tick from ITickStorage.sol
    struct Tick {
        uint256 next;
        uint256 currencyDemandQ96;
    }

    /// Checkpoint from CheckpointLib.sol. `ValueX7` is carried as its
    /// underlying uint256.
    struct Checkpoint {
        uint256 clearingPrice; // The X96 price which the auction is currently clearing at
        uint256 currencyRaisedAtClearingPriceQ96_X7; // The currency raised so far to this clearing price
        uint256 cumulativeMpsPerPrice; // A running sum of the ratio between mps and price
        uint24 cumulativeMps; // The number of mps sold in the auction so far (via the original supply schedule)
        uint64 prev; // Block number of the previous checkpoint
        uint64 next; // Block number of the next checkpoint
    }

    /// AuctionStep from StepLib.sol
    struct AuctionStep {
        uint24 mps; // Mps to sell per block in the step
        uint64 startBlock; // Start block of the step (inclusive)
        uint64 endBlock; // Ending block of the step (exclusive)
    }

    #[sol(rpc)]
    interface IContinuousClearingAuction {
        error CheckpointBlockNotIncreasing();
        error BidIdDoesNotExist(uint256 bidId);

        // Events
        event TokensReceived(uint256 totalSupply);
        event AuctionStepRecorded(uint256 startBlock, uint256 endBlock, uint24 mps);
        event TickInitialized(uint256 price);
        event NextActiveTickUpdated(uint256 price);
        event BidSubmitted(uint256 indexed id, address indexed owner, uint256 price, uint128 amount);
        event CheckpointUpdated(uint256 blockNumber, uint256 clearingPrice, uint24 cumulativeMps);
        event ClearingPriceUpdated(uint256 blockNumber, uint256 clearingPrice);
        event BidExited(uint256 indexed bidId, address indexed owner, uint256 tokensFilled, uint256 currencyRefunded);
        event TokensClaimed(uint256 indexed bidId, address indexed owner, uint256 tokensFilled);
        event TokensSwept(address indexed tokensRecipient, uint256 tokensAmount);
        event CurrencySwept(address indexed fundsRecipient, uint256 currencyAmount);

        // Schedule
        function startBlock() external view returns (uint64);
        function endBlock() external view returns (uint64);
        function claimBlock() external view returns (uint64);
        function pointer() external view returns (address);
        function step() external view returns (AuctionStep memory);

        // Pricing
        function floorPrice() external view returns (uint256);
        function tickSpacing() external view returns (uint256);
        function nextActiveTickPrice() external view returns (uint256);
        function ticks(uint256 price) external view returns (Tick memory);

        // Checkpoints
        function latestCheckpoint() external view returns (Checkpoint memory);
        function lastCheckpointedBlock() external view returns (uint64);
        function checkpoints(uint64 blockNumber) external view returns (Checkpoint memory);

        // Totals
        function totalSupply() external view returns (uint128);
        function currencyRaised() external view returns (uint256);
        function totalCleared() external view returns (uint256);
        function isGraduated() external view returns (bool);

        function currency() external view returns (address);
        function token() external view returns (address);
        function validationHook() external view returns (address);
    }
}
