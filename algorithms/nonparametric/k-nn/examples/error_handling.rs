//! Example demonstrating error handling with the k-NN classifier.
//!
//! Every misuse of the classifier surfaces as a `KnnError` value instead of a
//! panic: predicting before fitting, bad `k` values, malformed queries and
//! failures inside a batch.

use k_nn::{ClassifierState, KnnClassifier, KnnError, SearchStrategy};
use magic_helpers::{L2Dist, Record};
use ndarray::array;

fn main() {
    println!("k-NN Classifier Error Handling Examples");
    println!("=======================================");

    let training_data = vec![
        Record::new(1, array![1.0, 1.0], "Class A"),
        Record::new(2, array![2.0, 2.0], "Class A"),
        Record::new(3, array![1.0, 2.0], "Class A"),
        Record::new(4, array![8.0, 8.0], "Class B"),
        Record::new(5, array![9.0, 8.0], "Class B"),
        Record::new(6, array![8.0, 9.0], "Class B"),
    ];

    // Example 1: Predict before fit
    println!("\n1. Predicting with an unfitted classifier:");
    let classifier: KnnClassifier<&str, f64, L2Dist> = KnnClassifier::new();
    match classifier.predict(array![1.0, 1.0].view()) {
        Err(KnnError::NotFitted) => println!("   ✓ Caught expected error: {}", KnnError::NotFitted),
        other => println!("   ✗ Unexpected result: {:?}", other),
    }

    // Example 2: Handle invalid k values
    println!("\n2. Handling invalid k values:");
    for k in [0, 7] {
        let mut classifier = KnnClassifier::new();
        match classifier.fit(&training_data, k, L2Dist) {
            Ok(()) => println!("   Classifier fitted with k={}", k),
            Err(e) => println!("   ✓ k={}: {}", k, e),
        }
    }

    // Example 3: Successful prediction with both search strategies
    println!("\n3. Successful prediction with error handling:");
    for strategy in [SearchStrategy::default(), SearchStrategy::Linear] {
        let mut classifier = KnnClassifier::with_strategy(strategy);
        if let Err(e) = classifier.fit(&training_data, 3, L2Dist) {
            println!("   ✗ Failed to fit classifier: {}", e);
            continue;
        }
        println!("   ✓ Classifier fitted ({:?})", strategy);

        let test_points = vec![
            (array![2.5, 2.5], "should be Class A"),
            (array![7.5, 8.5], "should be Class B"),
        ];
        for (point, expected) in test_points {
            match classifier.predict(point.view()) {
                Ok(predicted_label) => {
                    println!("   ✓ Prediction successful: {} ({})", predicted_label, expected)
                }
                Err(e) => println!("   ✗ Prediction failed: {}", e),
            }
        }
        assert_eq!(classifier.state(), ClassifierState::Predicting);
    }

    // Example 4: A malformed record fails the whole batch
    println!("\n4. Batch prediction with a malformed record:");
    let mut classifier = KnnClassifier::new();
    if classifier.fit(&training_data, 3, L2Dist).is_ok() {
        let batch = vec![
            Record::new(10, array![2.0, 1.0], "?"),
            Record::new(11, array![f64::NAN, 1.0], "?"),
        ];
        match classifier.predict_batch(&batch) {
            Ok(labels) => println!("   ✗ Unexpected labels: {:?}", labels),
            Err(e) => println!("   ✓ Batch rejected: {}", e),
        }
    }

    // Example 5: Error propagation in a function
    println!("\n5. Error propagation in functions:");

    fn classify_with_error_handling() -> Result<String, KnnError> {
        let training_data = vec![
            Record::new(1, array![1.0], "positive"),
            Record::new(2, array![-1.0], "negative"),
        ];

        let mut classifier = KnnClassifier::new();
        classifier.fit(&training_data, 1, L2Dist)?;
        let result = classifier.predict(array![0.5].view())?;
        Ok(result.to_string())
    }

    match classify_with_error_handling() {
        Ok(result) => println!("   ✓ Classification result: {}", result),
        Err(e) => println!("   ✗ Classification failed: {}", e),
    }

    println!("\nAll examples completed successfully!");
}
