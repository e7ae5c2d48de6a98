//! The contract registry: which addresses the pipeline cares about, and how
//! to decode and attribute their logs.

use crate::{
    abi::{omoc, ContractModule},
    config::{
        AddressesConfig, OmocConfig, REGISTRY_MOC_DELAY_MACHINE, REGISTRY_MOC_VESTING_MACHINE,
        REGISTRY_MOC_VOTING_MACHINE, REGISTRY_SUPPORTERS_ADDR,
    },
    errors::{ProviderError, RegistryError},
    traits::NodeProvider,
    util,
};
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use std::{
    collections::{HashMap, HashSet},
    fmt,
};
use tracing::info;

const LOG_TARGET: &str = "registry";

/// Which token instance a registered ERC-20 address represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTag {
    /// The collateral token.
    TC,
    /// A pegged token, by position in the configured list.
    TP(usize),
    /// A collateral asset, by position in the configured list.
    CA(usize),
    /// The protocol fee token.
    FeeToken,
}

impl fmt::Display for TokenTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TC => f.write_str("TC"),
            Self::TP(i) => write!(f, "TP_{i}"),
            Self::CA(i) => write!(f, "CA_{i}"),
            Self::FeeToken => f.write_str("FeeToken"),
        }
    }
}

/// What the registry knows about one address.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The contract family, deciding the event set its logs decode against.
    pub module: ContractModule,
    /// Human name used in logs and the revert path (`Moc`, `TP_0`, …).
    pub name: String,
    /// Token instance tag for ERC-20 bindings.
    pub token: Option<TokenTag>,
}

/// The set of contracts the indexer watches.
///
/// Built once at startup; OMOC governance addresses are dereferenced through
/// `IRegistry.getAddress` static calls before the first tick.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    bindings: HashMap<Address, Binding>,
    filter_set: HashSet<Address>,
    moc_queue: Address,
    tp: Vec<Address>,
    ca: Vec<Address>,
}

impl ContractRegistry {
    /// Builds the registry from the statically configured addresses alone.
    /// OMOC governance contracts are not bound; use [`Self::bootstrap`] for
    /// the full startup path.
    pub fn from_config(addresses: &AddressesConfig) -> Self {
        let mut registry = Self {
            bindings: HashMap::new(),
            filter_set: HashSet::new(),
            moc_queue: addresses.moc_queue,
            tp: addresses.tp.clone(),
            ca: addresses.ca.clone(),
        };

        registry.insert(addresses.moc, ContractModule::Moc, "Moc".to_string(), None);
        registry.insert(addresses.moc_queue, ContractModule::MocQueue, "MocQueue".to_string(), None);
        registry.insert(addresses.tc, ContractModule::Token, "TC".to_string(), Some(TokenTag::TC));
        for (i, tp) in addresses.tp.iter().enumerate() {
            registry.insert(*tp, ContractModule::Token, format!("TP_{i}"), Some(TokenTag::TP(i)));
        }
        for (i, ca) in addresses.ca.iter().enumerate() {
            registry.insert(*ca, ContractModule::Token, format!("CA_{i}"), Some(TokenTag::CA(i)));
        }
        if let Some(fee_token) = addresses.fee_token {
            registry.insert(
                fee_token,
                ContractModule::Token,
                "FeeToken".to_string(),
                Some(TokenTag::FeeToken),
            );
        }
        if let Some(bridge) = addresses.fast_btc_bridge {
            registry.insert(
                bridge,
                ContractModule::FastBtcBridge,
                "FastBtcBridge".to_string(),
                None,
            );
        }
        if let Some(incentive) = addresses.incentive_v2 {
            registry.insert(
                incentive,
                ContractModule::IncentiveV2,
                "IncentiveV2".to_string(),
                None,
            );
        }

        registry
    }

    /// Builds the registry from configuration, resolving OMOC addresses
    /// through the node when an `IRegistry` is configured.
    pub async fn bootstrap<P: NodeProvider + ?Sized>(
        addresses: &AddressesConfig,
        omoc: Option<&OmocConfig>,
        provider: &P,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::from_config(addresses);

        if let (Some(i_registry), Some(omoc)) = (addresses.i_registry, omoc) {
            for (constant, module, name) in [
                (REGISTRY_MOC_DELAY_MACHINE, ContractModule::DelayMachine, "DelayMachine"),
                (REGISTRY_SUPPORTERS_ADDR, ContractModule::Supporters, "Supporters"),
                (REGISTRY_MOC_VESTING_MACHINE, ContractModule::VestingFactory, "VestingFactory"),
                (REGISTRY_MOC_VOTING_MACHINE, ContractModule::VotingMachine, "VotingMachine"),
            ] {
                let resolved =
                    resolve_registry_address(provider, i_registry, omoc, constant).await?;
                info!(
                    target: LOG_TARGET,
                    "Resolved {} to {} through IRegistry", name, util::addr_lower(&resolved)
                );
                registry.insert(resolved, module, name.to_string(), None);
            }
        }

        info!(
            target: LOG_TARGET,
            "Watching {} contract addresses", registry.filter_set.len()
        );
        Ok(registry)
    }

    fn insert(&mut self, address: Address, module: ContractModule, name: String, token: Option<TokenTag>) {
        self.filter_set.insert(address);
        self.bindings.insert(address, Binding { module, name, token });
    }

    /// What the registry knows about an address, if anything.
    pub fn binding(&self, address: &Address) -> Option<&Binding> {
        self.bindings.get(address)
    }

    /// The union of all registered addresses; transactions not touching it
    /// are pruned before receipt fetch.
    pub const fn filter_set(&self) -> &HashSet<Address> {
        &self.filter_set
    }

    /// The operations queue address, target of the parameter getters.
    pub const fn moc_queue(&self) -> Address {
        self.moc_queue
    }

    /// Position of a pegged token address in the configured list.
    pub fn tp_index(&self, address: &Address) -> Option<usize> {
        self.tp.iter().position(|tp| tp == address)
    }

    /// Position of a collateral asset address in the configured list.
    pub fn ca_index(&self, address: &Address) -> Option<usize> {
        self.ca.iter().position(|ca| ca == address)
    }

    /// The name of the stable-protocol contract an address belongs to, if
    /// any. Bridge and governance contracts are excluded: a revert against
    /// those does not synthesize an `ERROR` operation.
    pub fn protocol_contract_name(&self, address: &Address) -> Option<&str> {
        self.bindings.get(address).and_then(|binding| match binding.module {
            ContractModule::Moc | ContractModule::MocQueue | ContractModule::Token => {
                Some(binding.name.as_str())
            }
            _ => None,
        })
    }
}

async fn resolve_registry_address<P: NodeProvider + ?Sized>(
    provider: &P,
    i_registry: Address,
    omoc: &OmocConfig,
    constant: &str,
) -> Result<Address, RegistryError> {
    let key = omoc
        .registry_constants
        .get(constant)
        .copied()
        .ok_or_else(|| RegistryError::MissingConstant(constant.to_string()))?;
    let call = omoc::getAddressCall { key };
    let returned = provider
        .call(i_registry, call.abi_encode().into())
        .await
        .map_err(|source| RegistryError::Resolution { name: constant.to_string(), source })?;
    let address = omoc::getAddressCall::abi_decode_returns(&returned).map_err(|e| {
        RegistryError::Resolution {
            name: constant.to_string(),
            source: ProviderError::Call { to: i_registry, reason: e.to_string() },
        }
    })?;
    if address.is_zero() {
        return Err(RegistryError::ZeroAddress(constant.to_string()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_addresses, TestNodeProvider};
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;

    #[tokio::test]
    async fn binds_all_configured_contracts() {
        let provider = TestNodeProvider::default();
        let addresses = test_addresses();
        let registry =
            ContractRegistry::bootstrap(&addresses, None, &provider).await.unwrap();

        assert_eq!(registry.filter_set().len(), 8);
        assert_eq!(registry.binding(&addresses.moc).unwrap().name, "Moc");
        let tp1 = registry.binding(&addresses.tp[1]).unwrap();
        assert_eq!(tp1.token, Some(TokenTag::TP(1)));
        assert_eq!(registry.tp_index(&addresses.tp[1]), Some(1));
        assert_eq!(registry.tp_index(&addresses.ca[0]), None);
        assert_eq!(registry.ca_index(&addresses.ca[0]), Some(0));
    }

    #[tokio::test]
    async fn revert_attribution_excludes_bridge_contracts() {
        let provider = TestNodeProvider::default();
        let addresses = test_addresses();
        let registry =
            ContractRegistry::bootstrap(&addresses, None, &provider).await.unwrap();

        assert_eq!(registry.protocol_contract_name(&addresses.moc), Some("Moc"));
        assert_eq!(registry.protocol_contract_name(&addresses.tp[0]), Some("TP_0"));
        assert_eq!(
            registry.protocol_contract_name(&addresses.fast_btc_bridge.unwrap()),
            None
        );
        assert_eq!(
            registry.protocol_contract_name(&address!("9923456789012345678901234567890123456789")),
            None
        );
    }

    #[tokio::test]
    async fn resolves_omoc_addresses_through_iregistry() {
        let provider = TestNodeProvider::default();
        let i_registry = address!("7123456789012345678901234567890123456789");
        let delay = address!("8123456789012345678901234567890123456789");
        let supporters = address!("8223456789012345678901234567890123456789");
        let vesting = address!("8323456789012345678901234567890123456789");
        let voting = address!("8423456789012345678901234567890123456789");

        let mut constants = std::collections::HashMap::new();
        for (name, key, resolved) in [
            (REGISTRY_MOC_DELAY_MACHINE, 1u8, delay),
            (REGISTRY_SUPPORTERS_ADDR, 2, supporters),
            (REGISTRY_MOC_VESTING_MACHINE, 3, vesting),
            (REGISTRY_MOC_VOTING_MACHINE, 4, voting),
        ] {
            let mut key_bytes = [0u8; 32];
            key_bytes[31] = key;
            let key = alloy_primitives::B256::from(key_bytes);
            constants.insert(name.to_string(), key);
            let call = omoc::getAddressCall { key };
            provider.insert_call(i_registry, call.abi_encode().into(), resolved.abi_encode().into());
        }

        let mut addresses = test_addresses();
        addresses.i_registry = Some(i_registry);
        let omoc_config = OmocConfig { registry_constants: constants };
        let registry =
            ContractRegistry::bootstrap(&addresses, Some(&omoc_config), &provider).await.unwrap();

        assert_eq!(registry.binding(&delay).unwrap().name, "DelayMachine");
        assert_eq!(registry.binding(&voting).unwrap().module, ContractModule::VotingMachine);
        assert!(registry.filter_set().contains(&supporters));
        assert_eq!(registry.protocol_contract_name(&vesting), None);
    }

    #[tokio::test]
    async fn missing_constant_fails_bootstrap() {
        let provider = TestNodeProvider::default();
        let mut addresses = test_addresses();
        addresses.i_registry = Some(address!("7123456789012345678901234567890123456789"));
        let omoc_config = OmocConfig { registry_constants: Default::default() };
        let err = ContractRegistry::bootstrap(&addresses, Some(&omoc_config), &provider)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingConstant(_)));
    }
}
