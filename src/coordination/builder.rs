//! Outbound message construction for an observed intent

use crate::chain::ChainEntry;
use crate::codec::{encode_address, encode_extra_args, Evm2AnyMessage, Operation, TokenAmount};
use crate::events::{Intent, IntentKind};

/// Build the message relaying `intent` from `source` to `destination`
///
/// Deposits and withdraw executions carry the locked tokens and credit the
/// user remotely. Withdraw requests carry nothing and ask the remote ledger
/// to send the funds back to `source`.
pub fn build_message(
    intent: &Intent,
    source: &ChainEntry,
    destination: &ChainEntry,
    dest_gas_limit: Option<u64>,
) -> Evm2AnyMessage {
    let (operation, token_amounts) = match intent.kind {
        IntentKind::DepositRequested | IntentKind::WithdrawExecutionRequested => (
            Operation::Deposit { user: intent.user },
            vec![TokenAmount {
                token: intent.token,
                amount: intent.amount,
            }],
        ),
        IntentKind::WithdrawRequested => (
            Operation::Withdraw {
                user: intent.user,
                token: intent.token,
                amount: intent.amount,
                destination_chain: source.selector,
            },
            Vec::new(),
        ),
    };

    Evm2AnyMessage {
        receiver: encode_address(destination.contracts.receiver),
        data: operation.encode(),
        token_amounts,
        fee_token: source.contracts.fee_token,
        extra_args: encode_extra_args(dest_gas_limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_extra_args, EVM_EXTRA_ARGS_V1_TAG};
    use crate::config::ChainContracts;
    use ethers::types::{Address, U256};

    fn entry(name: &str, selector: u64, byte: u8) -> ChainEntry {
        ChainEntry {
            name: name.into(),
            selector,
            contracts: ChainContracts {
                ledger: Address::repeat_byte(byte),
                receiver: Address::repeat_byte(byte + 1),
                router: Address::repeat_byte(byte + 2),
                fee_token: Address::repeat_byte(byte + 3),
            },
        }
    }

    fn intent(kind: IntentKind) -> Intent {
        Intent {
            kind,
            user: Address::repeat_byte(0xaa),
            token: Address::repeat_byte(0xbb),
            amount: U256::exp10(18),
            destination_chain: 2,
        }
    }

    #[test]
    fn test_deposit_carries_transfer() {
        let (x, s) = (entry("x", 1, 0x10), entry("s", 2, 0x20));
        let message = build_message(&intent(IntentKind::DepositRequested), &x, &s, Some(200_000));

        assert_eq!(message.receiver, encode_address(s.contracts.receiver));
        assert_eq!(
            Operation::decode(&message.data).unwrap(),
            Operation::Deposit {
                user: Address::repeat_byte(0xaa)
            }
        );
        assert_eq!(message.token_amounts.len(), 1);
        assert_eq!(message.token_amounts[0].amount, U256::exp10(18));
        assert_eq!(message.fee_token, x.contracts.fee_token);
        assert_eq!(&message.extra_args[..4], &EVM_EXTRA_ARGS_V1_TAG);
        assert_eq!(
            decode_extra_args(&message.extra_args).unwrap(),
            Some(U256::from(200_000u64))
        );
    }

    #[test]
    fn test_withdraw_execution_is_a_deposit_back() {
        let (x, s) = (entry("x", 1, 0x10), entry("s", 2, 0x20));
        let message = build_message(
            &intent(IntentKind::WithdrawExecutionRequested),
            &x,
            &s,
            None,
        );
        assert!(matches!(
            Operation::decode(&message.data).unwrap(),
            Operation::Deposit { .. }
        ));
        assert_eq!(message.token_amounts.len(), 1);
        assert!(message.extra_args.is_empty());
    }

    #[test]
    fn test_withdraw_request_names_return_chain() {
        let (x, s) = (entry("x", 1, 0x10), entry("s", 2, 0x20));
        let message = build_message(&intent(IntentKind::WithdrawRequested), &x, &s, None);
        assert!(message.token_amounts.is_empty());
        assert_eq!(
            Operation::decode(&message.data).unwrap(),
            Operation::Withdraw {
                user: Address::repeat_byte(0xaa),
                token: Address::repeat_byte(0xbb),
                amount: U256::exp10(18),
                destination_chain: 1,
            }
        );
    }
}
