// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Static contract interfaces. Every selector and event topic the pipeline
//! understands is generated here at compile time.

use alloy::primitives::B256;
use alloy::sol;
use alloy_sol_types::SolEvent;

use crate::domain::models::ExchangeType;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface KeeperAccessControl {
        function harvest(address strategy) external returns (uint256);
        function harvestNoReturn(address strategy) external;
        function harvestWithPrice(address strategy, uint256 price) external returns (uint256);
        function tend(address strategy) external returns (uint256);
        function tendWithPrice(address strategy, uint256 price) external returns (uint256);
        function earn(address strategy) external;
    }
}

// Strategy generations. V1 strategies reach their vault through a controller,
// V1.5 strategies link it directly.
sol! {
    interface StrategyV1 {
        function controller() external view returns (address);
        function want() external view returns (address);
        function getName() external view returns (string);
    }

    interface ControllerV1 {
        function vaults(address want) external view returns (address);
        function strategies(address want) external view returns (address);
    }

    interface StrategyV15 {
        function baseStrategyVersion() external pure returns (string);
        function want() external view returns (address);
        function vault() external view returns (address);
        function getName() external view returns (string);
    }

    interface VaultV15 {
        function strategy() external view returns (address);
    }
}

sol! {
    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
    }

    interface ICurvePool {
        function coins(uint256 i) external view returns (address);
        function balances(uint256 i) external view returns (uint256);
        function lp_token() external view returns (address);
    }

    // Pre-factory pools (renBTC, sBTC, tBTC) index coins with int128.
    interface ICurvePoolLegacy {
        function coins(int128 i) external view returns (address);
        function balances(int128 i) external view returns (uint256);
    }

    interface IUniswapPool {
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    interface UniswapV2PairEvents {
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );
    }

    interface CurvePoolEvents {
        event TokenExchange(
            address indexed buyer,
            int128 sold_id,
            uint256 tokens_sold,
            int128 bought_id,
            uint256 tokens_bought
        );
    }

    interface CurveCryptoPoolEvents {
        event TokenExchange(
            address indexed buyer,
            uint256 sold_id,
            uint256 tokens_sold,
            uint256 bought_id,
            uint256 tokens_bought
        );
    }

    interface UniswapV3PoolEvents {
        event Swap(
            address indexed sender,
            address indexed recipient,
            int256 amount0,
            int256 amount1,
            uint160 sqrtPriceX96,
            uint128 liquidity,
            int24 tick
        );
    }
}

/// Topic0 values of the swap events emitted by each exchange family.
pub fn swap_topics(exchange: ExchangeType) -> Vec<B256> {
    match exchange {
        ExchangeType::UniswapV2 => vec![UniswapV2PairEvents::Swap::SIGNATURE_HASH],
        ExchangeType::Curve => vec![
            CurvePoolEvents::TokenExchange::SIGNATURE_HASH,
            CurveCryptoPoolEvents::TokenExchange::SIGNATURE_HASH,
        ],
        ExchangeType::UniswapV3 => vec![UniswapV3PoolEvents::Swap::SIGNATURE_HASH],
    }
}
