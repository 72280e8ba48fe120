use alloy::sol;

sol!(
    #[allow(missing_docs)]
    interface AssetDao {
        event proposalCreated(uint256 id, address creator);
        event proposalVoted(uint256 id, address voter);

        function join() external payable;
        function createProposal(uint256 lotSize, uint256 sharePrice, uint256 maxPerInvestor, string calldata proposalSummary) external;
        function voteProposal(uint256 proposalId, uint8 vote) external;
        function executeProposal(uint256 proposalId) external;
        function buyLot() external;

        function numProposal() external view returns (uint256);
        function addressToUser(address account) external view returns (bool);
        function owner() external view returns (address);

        // Declared getter for the per-proposal struct. The deployed struct
        // carries a nested per-address mapping, so the node cannot actually
        // serve this call; readers treat the failure as a miss.
        function proposals(uint256 proposalId) external view returns (uint256 lotSize, uint256 sharePrice, uint256 maxPerInvestor, string memory proposalSummary, address creator, uint256 deadline, uint256 yayVotes, uint256 nayVotes, bool executed);
    }
);

sol!(
    #[allow(missing_docs)]
    interface AssetToken {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mintToSelf(uint256 amount) external;
    }
);
