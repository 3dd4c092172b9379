//! Component discovery

use super::{
    ComponentDescriptor, IntegratedParallelProcessor, ParallelAgentProcessor,
    ParallelDataFrameProcessor, ParallelQueryProcessor, Processor, SimpleDataFrameProcessor,
};
use crate::agent::AgentFactory;
use crate::error::{ProcessorError, ProcessorResult};
use std::sync::Arc;

/// Descriptors of every component this crate provides
pub fn component_catalog() -> Vec<ComponentDescriptor> {
    vec![
        ParallelAgentProcessor::describe(),
        ParallelDataFrameProcessor::describe(),
        ParallelQueryProcessor::describe(),
        IntegratedParallelProcessor::describe(),
        SimpleDataFrameProcessor::describe(),
    ]
}

/// Instantiate a component by its name or processor type
pub fn create_processor(
    name: &str,
    factory: Arc<dyn AgentFactory>,
) -> ProcessorResult<Box<dyn Processor>> {
    let descriptor = component_catalog()
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name) || d.processor_type.as_str() == name)
        .ok_or_else(|| ProcessorError::invalid_input(format!("Unknown processor: {name}")))?;

    Ok(match descriptor.name {
        "ParallelAgentProcessor" => Box::new(ParallelAgentProcessor::new(factory)),
        "ParallelDataFrameProcessor" => Box::new(ParallelDataFrameProcessor::new(factory)),
        "ParallelQueryProcessor" => Box::new(ParallelQueryProcessor::new(factory)),
        "IntegratedParallelProcessor" => Box::new(IntegratedParallelProcessor::new(factory)),
        _ => Box::new(SimpleDataFrameProcessor::new(factory)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ProcessorKind;
    use crate::testing::mocks::StubAgentFactory;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let catalog = component_catalog();
        assert_eq!(catalog.len(), 5);

        let names: HashSet<_> = catalog.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 5);

        for descriptor in &catalog {
            assert!(descriptor.input("dataframe_input").is_some());
            assert!(descriptor.output("detailed_results").is_some());
        }
    }

    #[test]
    fn test_create_by_name_or_type() {
        let factory: Arc<dyn AgentFactory> = Arc::new(StubAgentFactory::echo());

        let by_type = create_processor("query", Arc::clone(&factory)).unwrap();
        assert_eq!(by_type.kind(), ProcessorKind::Query);

        let by_name = create_processor("parallelagentprocessor", Arc::clone(&factory)).unwrap();
        assert_eq!(by_name.kind(), ProcessorKind::ParallelAgents);

        assert!(create_processor("nope", factory).is_err());
    }
}
